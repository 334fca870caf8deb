mod goals;
